use std::env;
use std::process;

use log::error;
use rdbscan::{CatalogRegistry, JobConfig, PlanAssembler};

fn usage() -> ! {
    eprintln!("usage: rdbscan <job.json>");
    process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rdbscan::init_logging();

    let path = env::args().nth(1).unwrap_or_else(|| usage());
    let request = JobConfig::from_path(&path)?.into_read_request()?;

    let catalog = CatalogRegistry::with_defaults();
    let plan = match PlanAssembler::new(&catalog).assemble(&request).await {
        Ok(plan) => plan,
        Err(e) => {
            error!("planning {} failed: {}", request.table(), e);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
