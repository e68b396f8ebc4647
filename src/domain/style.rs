use super::{AccountType, TransactionKind};

/// Colour family a presentation layer uses for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Cyan,
    Emerald,
    Green,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStyle {
    pub label: &'static str,
    pub caption: &'static str,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindStyle {
    pub label: &'static str,
    pub sign: char,
    pub tone: Tone,
}

const ACCOUNT_STYLES: [(AccountType, AccountStyle); 2] = [
    (
        AccountType::Current,
        AccountStyle {
            label: "Current",
            caption: "Daily use",
            tone: Tone::Cyan,
        },
    ),
    (
        AccountType::Savings,
        AccountStyle {
            label: "Savings",
            caption: "Save money",
            tone: Tone::Emerald,
        },
    ),
];

const KIND_STYLES: [(TransactionKind, KindStyle); 2] = [
    (
        TransactionKind::Deposit,
        KindStyle {
            label: "Deposit",
            sign: '+',
            tone: Tone::Green,
        },
    ),
    (
        TransactionKind::Withdrawal,
        KindStyle {
            label: "Withdrawal",
            sign: '-',
            tone: Tone::Red,
        },
    ),
];

impl AccountType {
    pub fn style(&self) -> AccountStyle {
        ACCOUNT_STYLES
            .iter()
            .find(|(at, _)| at == self)
            .map(|(_, style)| *style)
            .unwrap_or(ACCOUNT_STYLES[0].1)
    }
}

impl TransactionKind {
    pub fn style(&self) -> KindStyle {
        KIND_STYLES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, style)| *style)
            .unwrap_or(KIND_STYLES[0].1)
    }
}
