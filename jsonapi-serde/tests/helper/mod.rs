use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

pub fn read_json_file(name: &str) -> Value {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", name].iter().collect();
    let file = File::open(&path).unwrap_or_else(|err| panic!("cannot open {}: {}", path.display(), err));
    serde_json::from_reader(BufReader::new(file)).unwrap()
}
