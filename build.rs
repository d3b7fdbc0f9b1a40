use vergen_gitcl::{BuildBuilder, Emitter, GitclBuilder};

fn main() {
    if let Err(e) = emit() {
        println!("cargo:warning=Vergen failed with error: {e}");
    }
}

fn emit() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let git = GitclBuilder::default()
        .sha(true)
        .commit_timestamp(true)
        .build()?;
    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&git)?
        .emit()?;
    Ok(())
}
