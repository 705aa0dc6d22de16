// Build script to compile the Slang shader to SPIR-V
//
// Both stages live in one module (entry points vertMain / fragMain), so a
// single blob is produced at the path the renderer loads at startup.

use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=shaders/");

    compile_shader("shaders/triangle.slang", "shaders/slang.spv");
}

fn compile_shader(input: &str, output: &str) {
    let input_path = Path::new(input);
    let output_path = Path::new(output);

    // Check if slangc is available
    let result = Command::new("slangc")
        .arg(input_path)
        .args(["-target", "spirv", "-profile", "spirv_1_4"])
        .arg("-emit-spirv-directly")
        .arg("-fvk-use-entrypoint-name")
        .args(["-entry", "vertMain", "-entry", "fragMain"])
        .arg("-o")
        .arg(output_path)
        .status();

    match result {
        Ok(status) if status.success() => {
            println!("Compiled {} -> {}", input, output);
        }
        Ok(status) => {
            panic!("Failed to compile {}: exit code {:?}", input, status.code());
        }
        Err(e) => {
            println!("cargo:warning=slangc not found ({}), shader was not compiled", e);
            println!(
                "cargo:warning=compile manually: slangc {} -target spirv -profile spirv_1_4 \
                 -emit-spirv-directly -fvk-use-entrypoint-name \
                 -entry vertMain -entry fragMain -o {}",
                input, output
            );
        }
    }
}
