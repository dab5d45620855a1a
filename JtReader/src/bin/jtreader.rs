//! `jtreader` command-line entry point

fn main() -> anyhow::Result<()> {
    jtreader::cli::run_cli()
}
