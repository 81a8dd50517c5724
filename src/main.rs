use std::env;
use tdx_quant::*;

fn usage() {
    println!("用法: tdx-quant <命令> [代码...]");
    println!("  frames              打印几个请求帧（不联网）");
    println!("  quote <代码...>     五档行情");
    println!("  kline <代码>        日K线（最近800条）");
    println!("  qfq <代码>          前复权日K线");
    println!("  gbbq <代码>         股本变迁");
    println!("服务器地址和超时取自环境变量 TDX_ADDR、TDX_TIMEOUT_MS");
}

fn print_frames() {
    let connect = Connect::request(1);
    println!("连接请求帧: {}", hex::encode(connect.encode()));

    let count = Count::request(2, Exchange::SH);
    println!("证券数量请求帧: {}", hex::encode(count.encode()));

    if let Ok(quote) = Quote::request(3, &["sz000001", "sh600008"]) {
        println!("行情请求帧: {}", hex::encode(quote.encode()));
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), ClientError> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(cmd) = args.first() else {
        usage();
        return Ok(());
    };
    let codes = &args[1..];

    if cmd == "frames" {
        print_frames();
        return Ok(());
    }
    if codes.is_empty() {
        usage();
        return Ok(());
    }

    let client = Client::connect_with(ClientConfig::from_env()?).await?;
    println!("{}", client.banner().trim());

    match cmd.as_str() {
        "quote" => {
            for q in client.get_quote(codes).await? {
                println!("{:?}", q);
            }
        }
        "kline" => {
            let resp = client.get_kline_day(&codes[0], 0, 800).await?;
            println!("{:?}", resp);
        }
        "qfq" => {
            let list = client.get_kline_day_adjusted(&codes[0], Adjust::Qfq).await?;
            for k in list.iter().rev().take(10) {
                println!("{:?}", k);
            }
        }
        "gbbq" => {
            let resp = client.get_gbbq(&codes[0]).await?;
            println!("{:?}", resp);
        }
        _ => usage(),
    }

    Ok(())
}
