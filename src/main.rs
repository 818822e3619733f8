use amayori::driver;

fn main() -> anyhow::Result<()> {
    driver::run()?;

    Ok(())
}
