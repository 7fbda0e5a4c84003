use f0_core::{LedgerError, ReferralEngine};
use f0_persistence::SqliteLedgerStore;
use serde_json::json;

const USAGE: &str = "Uso:
  f0 stats (--email <EMAIL> | --code <CODE>)
  f0 commission (--account <ID> | --code <CODE>) --amount <USD> [--order <ORDER_ID>]
  f0 statement --email <EMAIL>
  f0 clicks --code <CODE>";

/// Valor del flag `name` (`--name <valor>`), si está presente.
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn usage() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2);
}

/// Código de salida: 4 para rechazos del ledger, 5 para fallos de storage.
fn fail(cmd: &str, e: LedgerError) -> ! {
    eprintln!("[f0 {cmd}] error: {e}");
    std::process::exit(if e.is_transient() { 5 } else { 4 });
}

fn print(value: serde_json::Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("[f0] serialize error: {e}");
            std::process::exit(5);
        }
    }
}

fn main() {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().collect();
    let Some(cmd) = args.get(1).map(String::as_str) else { usage() };
    if !["stats", "commission", "statement", "clicks"].contains(&cmd) {
        usage();
    }
    let rest = &args[2..];

    let pool = match f0_persistence::build_pool_from_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[f0 {cmd}] pool error: {e}");
            std::process::exit(5);
        }
    };
    let engine = ReferralEngine::new(SqliteLedgerStore::from_pool(pool));

    match cmd {
        "stats" => {
            let stats = match (flag(rest, "--email"), flag(rest, "--code")) {
                (Some(email), _) => engine.account_by_email(email).and_then(|a| engine.stats_for(a.id)),
                (None, Some(code)) => engine.stats_for_code(code),
                _ => usage(),
            };
            let stats = stats.unwrap_or_else(|e| fail(cmd, e));
            print(json!({
                "referral_code": stats.referral_code,
                "clicks": stats.click_count,
                "signups": stats.referred_signup_count,
                "conversions": stats.conversions,
                "conversion_rate": stats.conversion_rate(),
                "total_revenue": stats.total_attributed_revenue.as_dollars(),
                "total_commission": stats.total_commission_earned.as_dollars(),
                "current_rate": stats.current_rate.as_fraction(),
                "next_tier_at": stats.next_breakpoint.map(|m| m.as_dollars()),
            }));
        }
        "commission" => {
            let Some(amount) = flag(rest, "--amount").and_then(|v| v.parse::<f64>().ok()) else { usage() };
            let order = flag(rest, "--order");
            let event = match (flag(rest, "--account"), flag(rest, "--code")) {
                (Some(id), _) => match id.parse::<i64>() {
                    Ok(id) => engine.record_commission(id, amount, order),
                    Err(_) => usage(),
                },
                (None, Some(code)) => engine.record_commission_for_code(code, amount, order),
                _ => usage(),
            };
            let event = event.unwrap_or_else(|e| fail(cmd, e));
            print(json!({
                "id": event.id,
                "account_id": event.account_id,
                "order_id": event.order_id,
                "amount": event.amount.as_dollars(),
                "rate": event.rate_applied.as_fraction(),
                "commission": event.commission_amount.as_dollars(),
            }));
        }
        "statement" => {
            let Some(email) = flag(rest, "--email") else { usage() };
            let events = engine.account_by_email(email)
                               .and_then(|a| engine.commissions_for(a.id))
                               .unwrap_or_else(|e| fail(cmd, e));
            for e in &events {
                println!("{}\t{}\t{}\t{}\t{}",
                         e.created_at.format("%Y-%m-%d %H:%M:%S"),
                         e.order_id.as_deref().unwrap_or("-"),
                         e.amount,
                         e.rate_applied,
                         e.commission_amount);
            }
            eprintln!("{} eventos", events.len());
        }
        "clicks" => {
            let Some(code) = flag(rest, "--code") else { usage() };
            let count = engine.click_count(code).unwrap_or_else(|e| fail(cmd, e));
            println!("{count}");
        }
        _ => usage(),
    }
}
