use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    fimcorpus::apps::run_cli(std::env::args().skip(1))
}
