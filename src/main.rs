fn main() -> anyhow::Result<()> {
    vitrine::run()
}
