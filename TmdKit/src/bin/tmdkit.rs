fn main() -> anyhow::Result<()> {
    tmdkit::cli::run_cli()
}
