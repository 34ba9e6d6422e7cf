use vergen_gitcl::{Build, Emitter, Gitcl};

// Embeds the build timestamp and git branch/sha/dirty flag read by
// `src/version.rs`. Outside a git checkout vergen emits defaults.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = Build::builder().build_timestamp(true).build();
    let git = Gitcl::builder().branch(true).sha(true).dirty(true).build();

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&git)?
        .emit()?;

    Ok(())
}
