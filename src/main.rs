use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use homology_refine::config::{Config, RootingMethod, ScoringMethod, TreeBuildingMethod};
use homology_refine::scenario::load_scenario;
use homology_refine::{driver, species_tree::SpeciesTree};

/// Build per-block gene trees, reconcile them against a species tree, and iteratively
/// split blocks whose gene trees confidently contradict it, removing ancient homologies
/// from a pinch-graph alignment described by a scenario file.
#[derive(Parser, Debug)]
#[command(name = "homology-refine", version, about = "Iterative homology-refinement engine")]
struct Args {
    /// Path to the scenario file (events, threads, and blocks; see scenario.rs)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Bound on the contextual-neighborhood radius, in bases
    #[arg(long = "max-base-distance", default_value_t = 1000)]
    max_base_distance: u64,

    /// Bound on the contextual-neighborhood radius, in blocks
    #[arg(long = "max-block-distance", default_value_t = 10)]
    max_block_distance: u64,

    /// Canonical tree plus this many minus one bootstrap samples per block
    #[arg(long = "num-trees", default_value_t = 100)]
    num_trees: usize,

    /// NEIGHBOR_JOINING | GUIDED_NEIGHBOR_JOINING
    #[arg(long = "tree-building-method", value_enum, default_value_t = TreeBuildingMethod::GuidedNeighborJoining)]
    tree_building_method: TreeBuildingMethod,

    /// OUTGROUP_BRANCH | LONGEST_BRANCH | BEST_RECON
    #[arg(long = "rooting-method", value_enum, default_value_t = RootingMethod::BestRecon)]
    rooting_method: RootingMethod,

    /// RECON_COST | NUCLEOTIDE_LIKELIHOOD | RECON_LIKELIHOOD | COMBINED_LIKELIHOOD
    #[arg(long = "scoring-method", value_enum, default_value_t = ScoringMethod::ReconCost)]
    scoring_method: ScoringMethod,

    /// Weight of the breakpoint matrix relative to substitutions
    #[arg(long = "break-point-scaling-factor", default_value_t = 1.0)]
    break_point_scaling_factor: f64,

    /// Skip refinement of single-copy blocks
    #[arg(long = "skip-single-copy-blocks", default_value_t = false)]
    skip_single_copy_blocks: bool,

    /// Allow degree-1 blocks to survive a split instead of discarding the singleton
    #[arg(long = "allow-single-degree-blocks", default_value_t = false)]
    allow_single_degree_blocks: bool,

    /// Cost per duplication per base, scaling the guided-NJ join-cost matrix
    #[arg(long = "cost-per-dup-per-base", default_value_t = 1.0)]
    cost_per_dup_per_base: f64,

    /// Cost per loss per base, scaling the guided-NJ join-cost matrix
    #[arg(long = "cost-per-loss-per-base", default_value_t = 1.0)]
    cost_per_loss_per_base: f64,

    /// Optional path for per-block debug records (newick, partition, matrix, score)
    #[arg(long = "debug-file")]
    debug_file: Option<PathBuf>,

    /// Quiet mode: suppresses progress messages on stdout
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let config = Config {
        max_base_distance: args.max_base_distance,
        max_block_distance: args.max_block_distance,
        num_trees: args.num_trees,
        tree_building_method: args.tree_building_method,
        rooting_method: args.rooting_method,
        scoring_method: args.scoring_method,
        break_point_scaling_factor: args.break_point_scaling_factor,
        skip_single_copy_blocks: args.skip_single_copy_blocks,
        allow_single_degree_blocks: args.allow_single_degree_blocks,
        ignore_unaligned_bases: true,
        cost_per_dup_per_base: args.cost_per_dup_per_base,
        cost_per_loss_per_base: args.cost_per_loss_per_base,
        debug_file: args.debug_file.clone(),
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(2);
    }

    let t0 = Instant::now();
    let mut scenario = match load_scenario(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario {:?}: {e}", args.input);
            std::process::exit(3);
        }
    };
    let read_s = t0.elapsed().as_secs_f64();
    log_if(!args.quiet, format!("Reading in scenario {read_s:.3}s"));
    log_if(
        !args.quiet,
        format!(
            "Read {} events, {} threads, {} blocks",
            scenario.events.len(),
            scenario.graph.threads().count(),
            scenario.graph.blocks().count(),
        ),
    );

    if let Ok(species_tree) = SpeciesTree::from_event_tree(&scenario.events) {
        if let Ok(split_points) = species_tree.split_points(&scenario.events) {
            log_if(!args.quiet, format!("{} species events chosen as split points", split_points.len()));
        }
    }

    let t1 = Instant::now();
    let diagnostics = match driver::run(&mut scenario.graph, &scenario.events, &scenario.sequences, &config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Refinement failed: {e}");
            std::process::exit(4);
        }
    };
    let run_s = t1.elapsed().as_secs_f64();

    log_if(!args.quiet, format!("Partition driver {run_s:.3}s"));
    log_if(!args.quiet, format!("Initial split branches: {}", diagnostics.initial_split_branch_count));
    log_if(!args.quiet, format!("Splits performed: {}", diagnostics.splits_made));
    log_if(!args.quiet, format!("Final split branches: {}", diagnostics.final_split_branch_count));
    log_if(
        !args.quiet,
        format!(
            "Bases between single-degree blocks: {} -> {}",
            diagnostics.bases_between_single_degree_before, diagnostics.bases_between_single_degree_after
        ),
    );
    log_if(!args.quiet, format!("Blocks remaining: {}", scenario.graph.blocks().count()));
}

fn log_if(show: bool, msg: String) {
    if show {
        println!("{msg}");
    }
}
