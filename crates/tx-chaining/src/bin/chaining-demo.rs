//! Chained-transaction demo runner.
//!
//! Funds an in-memory wallet, then performs the three steps a user would:
//! sign Tx1, sign Tx2 (spending Tx1#0), submit Tx1 + Tx2.
//!
//! ```text
//! chaining-demo --config chaining.toml --funding-lovelace 15000000
//! chaining-demo --json
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tracing::info;

use chain_ada::AdaNetwork;
use tx_chaining::{
    load_config, logging, ChainOrchestrator, ChainingConfig, MemoryLedger, MemoryWallet, Slot,
    SubmissionReport, WalletProvider,
};

#[derive(Parser, Debug)]
#[command(name = "chaining-demo", version, about = "Sign and submit two chained transactions")]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// BIP-39 mnemonic of the wallet. A fresh one is generated when omitted.
    #[arg(long, env = "CHAINING_MNEMONIC")]
    mnemonic: Option<String>,

    /// Account under m/1852'/1815'.
    #[arg(long, default_value_t = 0)]
    account: u32,

    /// Address index within the account.
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Value of the single genesis record given to the wallet.
    #[arg(long, default_value_t = 15_000_000)]
    funding_lovelace: u64,

    /// Print the final state as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ChainingConfig::default(),
    };
    logging::init(&config.log_level);

    let network = config.network;
    let ledger = MemoryLedger::new(network, config.fee_params()).shared();
    let (wallet, generated) = match &args.mnemonic {
        Some(phrase) => (
            MemoryWallet::from_mnemonic(phrase, "", network, args.account, args.index, ledger.clone())?,
            None,
        ),
        None => {
            let (wallet, phrase) = MemoryWallet::generate(network, ledger.clone())?;
            info!("no mnemonic given, using a freshly generated wallet");
            (wallet, Some(phrase))
        }
    };
    if let (Some(phrase), false) = (&generated, args.json) {
        println!("Generated mnemonic (keep it to restore this wallet):");
        println!("  {phrase}");
    }

    ledger
        .lock()
        .map_err(|_| "ledger lock poisoned")?
        .fund(&wallet.address(), args.funding_lovelace);
    wallet.connect();
    info!(address = %wallet.address(), %network, lovelace = args.funding_lovelace, "wallet funded and connected");

    let mut orchestrator = ChainOrchestrator::new(wallet, config);

    let first = orchestrator.sign_first().await?;
    if !args.json {
        println!("Tx1 signed:   {first}");
    }

    let second = orchestrator.sign_second().await?;
    if !args.json {
        println!("Tx2 signed:   {second}");
    }

    let report = orchestrator.submit_both().await?;

    if args.json {
        let output = json_report(network, generated.as_deref(), &orchestrator, &report);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for (label, slot) in [("Tx1", Slot::First), ("Tx2", Slot::Second)] {
        match orchestrator.explorer_url(slot) {
            Some(url) => println!("{label} submitted: {url}"),
            None => println!("{label} not marked submitted"),
        }
    }
    if !(report.first.is_accepted() && report.second.is_accepted()) {
        println!("confirmation ids differed from local ids; see log for details");
    }

    Ok(())
}

/// Final state for `--json`; a generated mnemonic is included so the wallet can be restored.
fn json_report<W: WalletProvider>(
    network: AdaNetwork,
    generated_mnemonic: Option<&str>,
    orchestrator: &ChainOrchestrator<W>,
    report: &SubmissionReport,
) -> serde_json::Value {
    let mut output = json!({
        "network": network,
        "slots": orchestrator.snapshot(),
        "submission": report,
    });
    if let Some(phrase) = generated_mnemonic {
        output["mnemonic"] = json!(phrase);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn submitted_pair(
        mnemonic: &str,
    ) -> (ChainOrchestrator<MemoryWallet>, SubmissionReport) {
        let config = ChainingConfig::default();
        let ledger = MemoryLedger::new(config.network, config.fee_params()).shared();
        let wallet =
            MemoryWallet::from_mnemonic(mnemonic, "", config.network, 0, 0, ledger.clone()).unwrap();
        ledger.lock().unwrap().fund(&wallet.address(), 15_000_000);
        wallet.connect();

        let mut orchestrator = ChainOrchestrator::new(wallet, config);
        orchestrator.sign_first().await.unwrap();
        orchestrator.sign_second().await.unwrap();
        let report = orchestrator.submit_both().await.unwrap();
        (orchestrator, report)
    }

    #[tokio::test]
    async fn json_report_includes_generated_mnemonic() {
        let (_, phrase) = MemoryWallet::generate(
            AdaNetwork::Preprod,
            MemoryLedger::new(AdaNetwork::Preprod, Default::default()).shared(),
        )
        .unwrap();
        let (orchestrator, report) = submitted_pair(&phrase).await;

        let output = json_report(AdaNetwork::Preprod, Some(&phrase), &orchestrator, &report);

        assert_eq!(output["mnemonic"], phrase);
        assert_eq!(output["network"], "preprod");
        assert_eq!(output["slots"]["second"]["status"], "submitted");

        // The printed phrase restores the wallet that owns the chain.
        let restored = MemoryWallet::from_mnemonic(
            output["mnemonic"].as_str().unwrap(),
            "",
            AdaNetwork::Preprod,
            0,
            0,
            MemoryLedger::new(AdaNetwork::Preprod, Default::default()).shared(),
        )
        .unwrap();
        assert_eq!(restored.address(), orchestrator.wallet().address());
    }

    #[tokio::test]
    async fn json_report_omits_mnemonic_supplied_by_user() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let (orchestrator, report) = submitted_pair(phrase).await;

        let output = json_report(AdaNetwork::Preprod, None, &orchestrator, &report);

        assert!(output.get("mnemonic").is_none());
    }
}
