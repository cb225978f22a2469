use anyhow::Result;

fn main() -> Result<()> {
    cardbox::cli::run()
}
