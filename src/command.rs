//! The API commands this client knows how to call

use crate::{CoinPaymentsError, Result};
use std::fmt;
use std::str::FromStr;

/// A remote API command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    CreateTransaction,
    GetBasicInfo,
    Rates,
    Balances,
    GetDepositAddress,
    GetCallbackAddress,
    CreateTransfer,
    CreateWithdrawal,
    Convert,
    GetWithdrawalHistory,
    GetWithdrawalInfo,
    GetConversionInfo,
}

impl Command {
    /// Every supported command
    pub const ALL: [Command; 12] = [
        Command::CreateTransaction,
        Command::GetBasicInfo,
        Command::Rates,
        Command::Balances,
        Command::GetDepositAddress,
        Command::GetCallbackAddress,
        Command::CreateTransfer,
        Command::CreateWithdrawal,
        Command::Convert,
        Command::GetWithdrawalHistory,
        Command::GetWithdrawalInfo,
        Command::GetConversionInfo,
    ];

    /// Value sent as `cmd`
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateTransaction => "create_transaction",
            Command::GetBasicInfo => "get_basic_info",
            Command::Rates => "rates",
            Command::Balances => "balances",
            Command::GetDepositAddress => "get_deposit_address",
            Command::GetCallbackAddress => "get_callback_address",
            Command::CreateTransfer => "create_transfer",
            Command::CreateWithdrawal => "create_withdrawal",
            Command::Convert => "convert",
            Command::GetWithdrawalHistory => "get_withdrawal_history",
            Command::GetWithdrawalInfo => "get_withdrawal_info",
            Command::GetConversionInfo => "get_conversion_info",
        }
    }

    /// Whether the client's `ipn_url` is sent with this command
    pub fn needs_callback_url(&self) -> bool {
        matches!(
            self,
            Command::CreateTransaction | Command::GetCallbackAddress
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = CoinPaymentsError;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|command| command.name() == s)
            .ok_or_else(|| CoinPaymentsError::config(format!("Unknown command: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for command in Command::ALL {
            assert_eq!(command.name().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn test_convert_command_name() {
        assert_eq!(Command::Convert.to_string(), "convert");
    }

    #[test]
    fn test_callback_url_commands() {
        let with_callback: Vec<_> = Command::ALL
            .iter()
            .filter(|c| c.needs_callback_url())
            .collect();
        assert_eq!(
            with_callback,
            vec![&Command::CreateTransaction, &Command::GetCallbackAddress]
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = "get_tx_info_multi".parse::<Command>().unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }
}
