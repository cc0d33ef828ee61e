use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// IEC 61966-2-1 exact formula: sRGB to linear
fn srgb_to_linear_exact(srgb: f64) -> f64 {
    if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("gamma_table.rs");
    let mut file = File::create(&dest_path).unwrap();

    // One entry per 8-bit channel value, so lookups are exact (no interpolation)
    writeln!(file, "/// Linear light value for every 8-bit sRGB channel value").unwrap();
    writeln!(file, "/// Index: sRGB byte, Value: linear value in 0.0..=1.0").unwrap();
    writeln!(file, "pub static SRGB8_TO_LINEAR: [f32; 256] = [").unwrap();
    for i in 0..256 {
        let srgb = i as f64 / 255.0;
        let linear = srgb_to_linear_exact(srgb);
        if i > 0 && i % 8 == 0 {
            writeln!(file).unwrap();
        }
        // Debug formatting is the shortest representation that round-trips
        write!(file, "    {:?},", linear as f32).unwrap();
    }
    writeln!(file, "\n];").unwrap();

    println!("cargo::rerun-if-changed=build.rs");
}
