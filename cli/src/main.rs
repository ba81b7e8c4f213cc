use anyhow::Result;

fn main() -> Result<()> {
    resultexport_cli::run()
}
