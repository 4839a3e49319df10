use candle_core::Device;
use clap::Parser;
use sfrl_api::{finetune::run_finetune, variant::VariantSpec};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Evaluate the skills of a pretrained policy and finetune the best one")]
struct Args {
    /// Environment selector, `universe.domain.task` or a bare domain
    #[arg(long)]
    env: String,

    /// Base directory resolved against a relative --snapshot path
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    #[arg(long)]
    log_dir: PathBuf,

    /// Snapshot file holding the pretrained policy bundle
    #[arg(long)]
    snapshot: PathBuf,
}

fn parse_universe_domain_task(env: &str) -> (String, String, String) {
    let parts: Vec<&str> = env.splitn(3, '.').collect();
    match parts.as_slice() {
        [domain] => ("gym".into(), (*domain).into(), "default".into()),
        [universe, domain] => ((*universe).into(), (*domain).into(), "default".into()),
        [universe, domain, task] => ((*universe).into(), (*domain).into(), (*task).into()),
        _ => unreachable!(),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let (universe, domain, task) = parse_universe_domain_task(&args.env);

    let snapshot = match &args.snapshot_dir {
        Some(dir) if args.snapshot.is_relative() => dir.join(&args.snapshot),
        _ => args.snapshot.clone(),
    };
    let spec = VariantSpec::for_domain(&domain)?
        .with_snapshot(snapshot)
        .with_log_dir_base(&args.log_dir)
        .with_run_context(universe, task);
    let variants = spec.expand();
    log::info!("expanded {} variant(s) for domain {domain}", variants.len());

    let mut failed = 0usize;
    for variant in &variants {
        std::fs::create_dir_all(&variant.video_dir)?;
        log::info!("running variant in {}", variant.log_dir.display());
        // a failed variant must not block the remaining ones
        if let Err(err) = run_finetune(variant, &Device::Cpu, variant.env_name.clone()) {
            failed += 1;
            log::error!("variant {} aborted: {err}", variant.log_dir.display());
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} variant(s) failed", variants.len());
    }
    Ok(())
}
