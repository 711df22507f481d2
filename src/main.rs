use cifar_prep::pipeline::{run, PipelineConfig};

fn main() {
    let config = PipelineConfig::default();
    if let Err(e) = run(&config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
