use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;

use pawn_preproc::flatten::{flatten, reflatten};
use pawn_preproc::markers::{
    parse_markers, root_start_offset, strip_control_directives, Fragment, FragmentNode,
};
use pawn_preproc::tree::build_tree;

fn usage() -> ! {
    eprintln!("Usage: pawn-preproc <file.pwn> [-i <include dir>] [-o <out dir>] [--json]");
    eprintln!("       pawn-preproc --lst <file.lst> [-o <out dir>] [--json]");
    process::exit(2);
}

struct Args {
    input: Option<PathBuf>,
    lst: Option<PathBuf>,
    include_dir: PathBuf,
    out_dir: Option<PathBuf>,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        input: None,
        lst: None,
        include_dir: PathBuf::from("include"),
        out_dir: None,
        json: false,
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-i" => match it.next() {
                Some(dir) => args.include_dir = PathBuf::from(dir),
                None => usage(),
            },
            "-o" => match it.next() {
                Some(dir) => args.out_dir = Some(PathBuf::from(dir)),
                None => usage(),
            },
            "--lst" => match it.next() {
                Some(file) => args.lst = Some(PathBuf::from(file)),
                None => usage(),
            },
            "--json" => args.json = true,
            _ if args.input.is_none() && !arg.starts_with('-') => {
                args.input = Some(PathBuf::from(arg));
            }
            _ => usage(),
        }
    }

    args
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();

    let result = if let Some(lst) = args.lst.clone() {
        inspect_lst(&lst, &args)
    } else if let Some(input) = args.input.clone() {
        inspect_tree(&input, &args)
    } else {
        usage();
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

/// Build the include tree for a source file, optionally writing the
/// first-generation fragment set (plus its index map) to disk.
fn inspect_tree(input: &Path, args: &Args) -> pawn_preproc::Result<()> {
    let tree = build_tree(input, &args.include_dir)?;

    if let Some(out_dir) = &args.out_dir {
        let (entry, map) = flatten(&tree, out_dir, &[])?;
        let map_json = serde_json::to_string_pretty(&map).unwrap_or_default();
        std::fs::write(out_dir.join("map.json"), map_json)?;
        eprintln!("Entry file: {}", entry.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tree).unwrap_or_default());
        return Ok(());
    }

    for node in tree.iter() {
        println!(
            "{:>4}  {}  <- {}  (includes: {:?})",
            node.index,
            node.symbol,
            node.real_file.display(),
            node.children
        );
    }

    Ok(())
}

/// Rebuild the fragment tree from a merged `.lst` file, optionally writing
/// the second-generation file set (plus its index map) to disk.
fn inspect_lst(lst: &Path, args: &Args) -> pawn_preproc::Result<()> {
    let merged = std::fs::read_to_string(lst)?;
    let stripped = strip_control_directives(&merged)?;
    let offset = root_start_offset(&stripped, 0)?;
    let fragment_tree = parse_markers(&stripped, 0, offset)?;

    if let Some(out_dir) = &args.out_dir {
        std::fs::create_dir_all(out_dir)?;
        let (entry, map) = reflatten(&fragment_tree, out_dir)?;
        let map_json = serde_json::to_string_pretty(&map).unwrap_or_default();
        std::fs::write(out_dir.join("map.json"), map_json)?;
        eprintln!("Entry file: {}", entry.display());
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&fragment_value(&fragment_tree)).unwrap_or_default()
        );
    } else {
        print_fragment(&fragment_tree, 0);
    }

    Ok(())
}

fn fragment_value(node: &FragmentNode) -> serde_json::Value {
    let children: Vec<serde_json::Value> = node
        .fragments
        .iter()
        .filter_map(|f| match f {
            Fragment::File(child) => Some(fragment_value(child)),
            Fragment::Text(_) => None,
        })
        .collect();

    serde_json::json!({
        "index": node.index,
        "text_bytes": node.own_text().len(),
        "children": children,
    })
}

fn print_fragment(node: &FragmentNode, depth: usize) {
    println!(
        "{:indent$}@{} ({} bytes of text)",
        "",
        node.index,
        node.own_text().len(),
        indent = depth * 2
    );
    for fragment in &node.fragments {
        if let Fragment::File(child) = fragment {
            print_fragment(child, depth + 1);
        }
    }
}
