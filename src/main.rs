fn main() -> anyhow::Result<()> {
    dart_tidy::run_cli()
}
