use unicode_regen::{get_matches, run};

fn main() -> anyhow::Result<()> {
    let m = get_matches();
    println!("{}", run(&m)?);
    Ok(())
}
