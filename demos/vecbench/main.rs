//! Exercises the vectorized API against the in-memory mock server —
//! nothing here talks to a real NFSv4.1 server, there is no transport for
//! one shipped in this crate (§6).

#[path = "../../tests/support/mod.rs"]
mod support;

use clap::{Parser, Subcommand};

use nfs4_vec_client::attrs::AttrMask;
use nfs4_vec_client::batch::IoVec;
use nfs4_vec_client::{file_from_path, Context};

use support::{MockCodec, MockServer};

#[derive(Parser)]
#[command(name = "vecbench", about = "Drives nfs4-vec-client against an in-memory mock server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Writes `count` small files under `/bench`, then reads them all back
    /// in one batched `readv`, reporting how many compounds it took.
    Roundtrip {
        #[arg(long, default_value_t = 16)]
        count: usize,
        #[arg(long, default_value_t = 64)]
        max_ops_per_compound: usize,
    },
    /// Lists whatever is under a directory.
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let server = MockServer::new();
    let transport_factory: Box<dyn FnOnce(&nfs4_vec_client::config::Config) -> Box<dyn nfs4_vec_client::transport::Transport>> =
        Box::new(move |_cfg| Box::new(support::MockTransport::new(server)));
    let codec = Box::new(MockCodec);

    let config_path = match &cli.command {
        Command::Roundtrip { max_ops_per_compound, .. } => Some(write_config(*max_ops_per_compound)),
        Command::Ls { .. } => None,
    };

    let ctx = Context::init(transport_factory, codec, config_path.as_deref(), None, "vecbench")
        .expect("mock context always initializes");

    match cli.command {
        Command::Roundtrip { count, .. } => roundtrip(&ctx, count),
        Command::Ls { path } => ls(&ctx, &path),
    }

    ctx.deinit();
}

fn write_config(max_ops_per_compound: usize) -> String {
    let mut file = tempfile::NamedTempFile::new().expect("temp config file");
    std::io::Write::write_all(&mut file, format!("max_ops_per_compound = {max_ops_per_compound}\n").as_bytes())
        .expect("writing temp config");
    let path = file.into_temp_path();
    let path_str = path.to_string_lossy().into_owned();
    let _ = path.keep();
    path_str
}

fn roundtrip(ctx: &Context, count: usize) {
    ctx.mkdirv(
        vec![nfs4_vec_client::batch::AttrSpec::new(
            file_from_path("/bench"),
            nfs4_vec_client::attrs::Attrs::new().set_mode(0o755),
        )],
        true,
    )
    .expect("mkdir /bench");

    for i in 0..count {
        let path = format!("/bench/file{i}.txt");
        let body = format!("payload for file {i}").into_bytes();
        ctx.writev(vec![IoVec::write(file_from_path(&path), 0, body).creating()], true)
            .unwrap_or_else(|e| panic!("writing {path}: {e}"));
    }

    let iovecs: Vec<IoVec> = (0..count).map(|i| IoVec::read(file_from_path(format!("/bench/file{i}.txt")), 0, 256)).collect();
    let (vresult, results) = ctx.readv(iovecs, false).expect("readv dispatches");

    println!("wrote and read back {count} files, ok={}", vresult.ok);
    for (i, result) in results.iter().enumerate() {
        println!("  file{i}.txt: {} bytes, eof={}", result.bytes_done, result.eof);
    }
}

fn ls(ctx: &Context, path: &str) {
    let entries = ctx.listdir(file_from_path(path), AttrMask::SIZE).expect("listdir succeeds");
    for entry in entries {
        println!("{}\t{}", entry.name, entry.attrs.size.unwrap_or(0));
    }
}
