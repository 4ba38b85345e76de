use gl_generator::{Api, Fallbacks, GlobalGenerator, Profile, Registry};
use std::env;
use std::fs::File;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let mut file = File::create(Path::new(&out_dir).join("bindings.rs")).unwrap();
    // GLES 3.0 is the common denominator between desktop drivers (through
    // SDL's GLES profile) and WebGL 2.
    Registry::new(Api::Gles2, (3, 0), Profile::Core, Fallbacks::All, [])
        .write_bindings(GlobalGenerator, &mut file)
        .unwrap();
    println!("cargo:rerun-if-changed=build.rs");
}
