use clap::Parser;

fn main() -> anyhow::Result<()> {
    trance_bell_lib::run(trance_bell_lib::cli::Cli::parse())
}
