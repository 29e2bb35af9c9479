fn main() -> anyhow::Result<()> {
    evograph::run()
}
