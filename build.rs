use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

// memory.x only matters when linking the bare-metal firmware, but copying
// it unconditionally keeps host and target builds identical.
fn main() -> io::Result<()> {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or(io::ErrorKind::NotFound)?);
    fs::write(out_dir.join("memory.x"), fs::read("memory.x")?)?;
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
