use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("chess-dataset").expect("binary exists");
    cmd.env_remove("RUST_LOG").env("CHESS_DATASET_LOG", "warn");
    cmd
}

#[test]
fn next_index_on_fresh_root_is_zero() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("dataset");

    bin()
        .args(["next-index", "--root"])
        .arg(&root)
        .assert()
        .success()
        .stdout("0\n");
    assert!(root.is_dir());
}

#[test]
fn next_index_skips_past_existing_games() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("game_0000")).unwrap();
    fs::create_dir_all(tmp.path().join("game_0011")).unwrap();

    bin()
        .args(["next-index", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout("12\n");
}

#[test]
fn normalize_writes_ground_truth() {
    let tmp = TempDir::new().unwrap();
    let game = tmp.path().join("game_0000_black");
    fs::create_dir_all(game.join("images")).unwrap();
    fs::write(game.join("images").join("frame_000000.png"), b"img").unwrap();
    fs::write(
        game.join("game.csv"),
        "from_frame,to_frame,fen\n0,0,12 8/8/8/8/8/8/8/K6k\n",
    )
    .unwrap();

    bin()
        .args(["normalize", "--root"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("games_written=1"));

    assert_eq!(
        fs::read_to_string(game.join("gt.csv")).unwrap(),
        "image_name,fen,viewpoint\nframe_000000.png,8/8/8/8/8/8/8/K6k,black\n"
    );
}

#[test]
fn extract_fens_writes_one_board_per_line() {
    let tmp = TempDir::new().unwrap();
    let pgn = tmp.path().join("games.pgn");
    let out = tmp.path().join("fens.txt");
    fs::write(&pgn, "[Event \"a\"]\n\n1. e4 e5 *\n\n[Event \"b\"]\n\n1. d4 *\n").unwrap();

    bin()
        .args(["extract-fens", "--include-start", "--pgn"])
        .arg(&pgn)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout("5\n");

    let lines: Vec<String> = fs::read_to_string(&out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");
    assert_eq!(lines[4], "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR");
}

#[test]
fn invalid_config_fails_with_message() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[dataset]\nviews_per_position_options = [5]\n").unwrap();

    bin()
        .arg("--config")
        .arg(&config)
        .args(["next-index", "--root"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn generate_rejects_list_source_without_path() {
    let tmp = TempDir::new().unwrap();

    bin()
        .args(["generate", "--source", "fen-list", "--num-games", "1", "--output-root"])
        .arg(tmp.path().join("dataset"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("source.path is required"));
}
