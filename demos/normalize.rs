use std::env;
use std::error::Error;
use std::fs;

use virtxml::AnyDocument;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: normalize <document.xml>");
        return Ok(());
    };
    let xml = fs::read_to_string(&path)?;
    let doc = AnyDocument::parse(&xml)?;
    println!("{}", doc.marshal()?);
    Ok(())
}
