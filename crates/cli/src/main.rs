fn main() -> anyhow::Result<()> {
    lathe_cli::run()
}
