use clap::{Arg, Command};
use rissim::error::SimResult;
use rissim::logging::{init_logging, parse_log_level, LogConfig, LogOutput};
use rissim::report::SearchReport;
use rissim::scenario::ScenarioConfig;
use rissim::simulation::SearchEngine;
use std::str::FromStr;
use tracing::error;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("rissim")
        .version("0.1.0")
        .about("UAV搭載RIS 秘匿通信シミュレーション")
        .long_about("RISを搭載したUAVの位置を格子探索し、\n\
                     盗聴者に対する秘匿レートが最大となる位置を求めます。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、組み込みの基本シナリオで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("乱数シードを上書き")
        )
        .arg(
            Arg::new("repetitions")
                .short('r')
                .long("repetitions")
                .value_name("N")
                .value_parser(clap::value_parser!(u32).range(1..))
                .help("セルあたりの試行回数を上書き（平均値を採用）")
        )
        .arg(
            Arg::new("parallel")
                .short('p')
                .long("parallel")
                .action(clap::ArgAction::SetTrue)
                .help("セル評価を並列実行")
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("探索結果をJSONで出力")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: セル単位)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .value_parser(|s: &str| LogOutput::from_str(s))
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    // ログ設定
    let log_config = LogConfig {
        level: matches
            .get_one::<String>("log-level")
            .map(|s| parse_log_level(s))
            .unwrap_or_else(|| LogConfig::level_for_verbosity(verbose_level)),
        output: matches.get_one::<LogOutput>("log-output").copied().unwrap_or(LogOutput::Console),
        log_dir: matches.get_one::<String>("log-dir").cloned().unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    };
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    println!("UAV搭載RIS 秘匿通信シミュレーション - rissim v0.1.0");
    println!();

    if let Err(e) = run(&matches, verbose_level) {
        error!("{}", e);
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオを読み込み、上書き設定を反映して実行
fn run(matches: &clap::ArgMatches, verbose_level: u8) -> SimResult<()> {
    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            if verbose_level > 0 {
                println!("シナリオファイル読み込み完了: {}", path);
            }
            scenario
        }
        None => ScenarioConfig::default(),
    };

    if let Some(&seed) = matches.get_one::<u64>("seed") {
        scenario.sim.seed = seed;
    }
    if let Some(&repetitions) = matches.get_one::<u32>("repetitions") {
        scenario.sim.repetitions = repetitions;
    }
    if matches.get_flag("parallel") {
        scenario.sim.parallel = true;
    }
    scenario.validate()?;

    scenario.print_summary();
    println!();

    // 情報表示のみの場合
    if matches.get_flag("info") {
        return Ok(());
    }

    let mut engine = SearchEngine::new(scenario, verbose_level);
    engine.initialize()?;
    let outcome = engine.run()?;

    let report = SearchReport::new(&engine.scenario_config, &engine.grid, &engine.endpoints, &outcome);
    report.print_summary();

    if let Some(path) = matches.get_one::<String>("output") {
        report.write_json(path)?;
        println!("レポート出力: {}", path);
    }

    Ok(())
}
