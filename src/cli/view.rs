//! Plain text rendering of the transaction log and the reputation scores
use ansi_term::Color::{Cyan, Purple};
use prettytable::{row, Table};
use web3::types::{TransactionReceipt, U256};

use auditor_client::{reputation::ReputationPair, transactions::ConfirmedTransaction};
use auditor_config::Config;

const CHART_TITLE: &str = "Reputation Scores";
const USER_REPUTATION: &str = "User Reputation";
const AUDITOR_REPUTATION: &str = "Auditor Reputation";
const BAR: &str = "█";

/// Table of confirmed transactions, one row per transaction in log order
pub fn render_transactions(transactions: &[ConfirmedTransaction]) -> String {
    if transactions.is_empty() {
        return "No transactions registered yet".to_string();
    }

    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row![
        "Id",
        "From",
        "To",
        r->"Amount (ETH)",
        "Category",
        r->"Block"
    ]);
    for transaction in transactions {
        let block = transaction
            .block_number
            .map(|block| block.to_string())
            .unwrap_or_default();
        table.add_row(row![
            transaction.id,
            format!("{:?}", transaction.from),
            format!("{:?}", transaction.to),
            r->transaction.amount,
            transaction.category,
            r->block
        ]);
    }

    table.to_string()
}

fn saturating_u64(x: U256) -> u64 {
    if x > U256::from(u64::MAX) {
        u64::MAX
    } else {
        x.as_u64()
    }
}

/// Horizontal bar chart of both reputation scores, scaled to fit in `width` columns
pub fn render_reputation(reputation: &ReputationPair, width: usize) -> String {
    let label_width = AUDITOR_REPUTATION.len();
    let user = saturating_u64(reputation.user);
    let auditor = saturating_u64(reputation.auditor);
    let max = user.max(auditor);

    // label, space, bar, space, score
    let score_width = reputation.user.to_string().len().max(reputation.auditor.to_string().len());
    let max_bar = width.saturating_sub(label_width + score_width + 2).max(1);
    let bar = |score: u64| {
        let len = if max == 0 {
            0
        } else {
            (u128::from(score) * max_bar as u128 / u128::from(max)) as usize
        };

        BAR.repeat(len)
    };

    format!(
        "{}\n{:<w$} {} {}\n{:<w$} {} {}",
        CHART_TITLE,
        USER_REPUTATION,
        Cyan.paint(bar(user)),
        reputation.user,
        AUDITOR_REPUTATION,
        Purple.paint(bar(auditor)),
        reputation.auditor,
        w = label_width
    )
}

/// Transaction log followed by the reputation chart, if any
pub fn render(
    transactions: &[ConfirmedTransaction],
    reputation: Option<&ReputationPair>,
    width: usize,
) -> String {
    let mut out = render_transactions(transactions);
    if let Some(reputation) = reputation {
        out.push_str("\n\n");
        out.push_str(&render_reputation(reputation, width));
    }

    out
}

pub fn render_receipt(receipt: &TransactionReceipt) -> String {
    match receipt.block_number {
        Some(block) => format!(
            "Transaction {:?} confirmed in block {}",
            receipt.transaction_hash, block
        ),
        None => format!("Transaction {:?} confirmed", receipt.transaction_hash),
    }
}

/// Table of configured networks. The selected one is marked with `*`
pub fn render_networks(config: &Config) -> String {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row![
        "",
        "Network",
        "Url",
        r->"Chain id",
        "Contract",
        r->"Confirmations"
    ]);
    for (name, network) in &config.networks {
        let selected = if *name == config.network { "*" } else { "" };
        let chain_id = network
            .chain_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let contract = network
            .contract_address
            .map(|address| format!("{:?}", address))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            selected,
            name,
            network.eth_jsonrpc_url,
            r->chain_id,
            contract,
            r->network.confirmations
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use auditor_client::ether::Ether;
    use web3::types::{H160, U64};

    use super::*;

    fn transaction(id: u64, category: &str) -> ConfirmedTransaction {
        ConfirmedTransaction {
            id: U256::from(id),
            from: H160::from_low_u64_be(1),
            to: H160::from_low_u64_be(0xabc),
            amount: "1.5".parse::<Ether>().unwrap(),
            category: category.to_string(),
            transaction_hash: None,
            block_number: Some(U64::from(16)),
        }
    }

    fn bars(line: &str) -> usize {
        line.matches(BAR).count()
    }

    #[test]
    fn empty_log() {
        assert_eq!(render_transactions(&[]), "No transactions registered yet");
    }

    #[test]
    fn rows_follow_log_order() {
        let out = render_transactions(&[transaction(2, "retail"), transaction(1, "food")]);

        let retail = out.find("retail").unwrap();
        let food = out.find("food").unwrap();
        assert!(retail < food);
        assert!(out.contains("Amount (ETH)"));
        assert!(out.contains("1.5"));
        assert!(out.contains("0x0000000000000000000000000000000000000abc"));
        assert_eq!(out.lines().filter(|line| line.contains("1.5")).count(), 2);
    }

    #[test]
    fn reputation_bars_are_scaled() {
        let pair = ReputationPair {
            user: U256::from(42),
            auditor: U256::from(7),
        };
        let out = render_reputation(&pair, 80);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], CHART_TITLE);
        assert!(lines[1].starts_with(USER_REPUTATION));
        assert!(lines[1].ends_with("42"));
        assert!(lines[2].starts_with(AUDITOR_REPUTATION));
        assert!(lines[2].ends_with(" 7"));
        // 80 columns minus label, score and separators
        assert_eq!(bars(lines[1]), 58);
        assert_eq!(bars(lines[2]), 9);
    }

    #[test]
    fn reputation_without_scores() {
        let out = render_reputation(&ReputationPair::default(), 80);

        assert_eq!(bars(&out), 0);
        assert!(out.contains(USER_REPUTATION));
        assert!(out.contains(AUDITOR_REPUTATION));
    }

    #[test]
    fn huge_reputation_does_not_overflow() {
        let pair = ReputationPair {
            user: U256::MAX,
            auditor: U256::one(),
        };
        let out = render_reputation(&pair, 200);
        let lines: Vec<&str> = out.lines().collect();

        assert!(bars(lines[1]) > 0);
        assert_eq!(bars(lines[2]), 0);
    }

    #[test]
    fn render_log_and_chart() {
        let pair = ReputationPair {
            user: U256::from(1),
            auditor: U256::from(2),
        };
        let transactions = vec![transaction(1, "retail")];

        let out = render(&transactions, Some(&pair), 80);
        assert!(out.starts_with(&render_transactions(&transactions)));
        assert!(out.ends_with(&render_reputation(&pair, 80)));

        assert_eq!(render(&transactions, None, 80), render_transactions(&transactions));
    }

    #[test]
    fn networks_table_marks_selection() {
        let config = Config::default();
        let out = render_networks(&config);
        let row = out.lines().find(|line| line.contains("development")).unwrap();

        assert!(row.contains('*'));
        assert!(row.contains("http://127.0.0.1:8545"));
    }
}
