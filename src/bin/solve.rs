use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use std::path::PathBuf;
use turmac::problems::{all_problems, get_problem, Mode, Problem};
use turmac::search::Objective;
use turmac::solver::Solver;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Standard,
    Extreme,
    Nightmare,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Mode {
        match m {
            ModeArg::Standard => Mode::Standard,
            ModeArg::Extreme => Mode::Extreme,
            ModeArg::Nightmare => Mode::Nightmare,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "solve", about = "Compute an optimal question strategy")]
struct Args {
    /// Bundled problem name; see --list
    problem: Option<String>,
    /// Catalog card numbers for an ad-hoc problem, e.g. --cards 4,9,11,14
    #[arg(long, value_delimiter = ',', conflicts_with = "problem")]
    cards: Vec<u16>,
    /// Mode for an ad-hoc problem
    #[arg(long, value_enum, default_value_t = ModeArg::Standard)]
    mode: ModeArg,
    /// Minimize the worst case instead of the expectation
    #[arg(long)]
    worst_case: bool,
    /// Write the solved strategy as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Drop unreachable cache entries before writing
    #[arg(long)]
    prune: bool,
    /// Replay the strategy against every hidden combination
    #[arg(long)]
    verify: bool,
    /// List bundled problems and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    if args.list {
        for kp in all_problems() {
            println!("{}\t{:?}\t{:?}", kp.name, kp.mode, kp.cards);
        }
        return Ok(());
    }

    let problem = match (&args.problem, args.cards.is_empty()) {
        (Some(name), _) => get_problem(name)
            .with_context(|| format!("unknown problem {:?}; try --list", name))?
            .problem(),
        (None, false) => Problem {
            cards: args.cards.clone(),
            mode: args.mode.into(),
        },
        (None, true) => bail!("give a problem name or --cards; see --list"),
    };

    let solver = Solver::new(&problem)?;
    let ctx = solver.context();
    eprintln!(
        "{:?} {:?}: {} verifiers, {} rules, {} combinations, {} proposals",
        problem.mode,
        problem.cards,
        ctx.num_verifiers,
        ctx.rules.len(),
        ctx.cwas.len(),
        ctx.queries.len()
    );

    let objective = if args.worst_case {
        Objective::WorstCase
    } else {
        Objective::Expectation
    };
    let mut result = solver.solve_with(objective, false);
    eprintln!(
        "solved in {:.2?}: rounds {:.4}, queries {:.4}, {} cached states",
        result.elapsed,
        result.root.rounds,
        result.root.queries,
        result.cache.len()
    );
    if let Some(mv) = &result.root.best {
        println!("first question: propose {} to verifier {}", mv.proposal, mv.verifier);
    } else {
        println!("the cards admit a single combination; nothing to ask");
    }

    if args.verify {
        let bar = ProgressBar::new(ctx.cwas.len() as u64);
        let mut rounds = 0.0;
        let mut queries = 0.0;
        for truth in 0..ctx.cwas.len() {
            let (r, q) = solver.replay_one(&result, truth);
            rounds += r;
            queries += q;
            bar.inc(1);
        }
        bar.finish();
        let n = ctx.cwas.len() as f64;
        eprintln!("replayed all: rounds {:.4}, queries {:.4}", rounds / n, queries / n);
        if objective == Objective::Expectation {
            assert!((rounds / n - result.root.rounds).abs() < 1e-6);
            assert!((queries / n - result.root.queries).abs() < 1e-6);
        }
    }

    if args.prune {
        let before = result.cache.len();
        solver.prune(&mut result);
        eprintln!("pruned cache {} -> {}", before, result.cache.len());
    }
    if let Some(path) = &args.output {
        std::fs::write(path, result.to_blob()?)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}
