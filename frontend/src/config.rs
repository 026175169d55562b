pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x92859261aFE2d31b3321D3db8686A87D1B141468";

pub struct Config {
    /// Deployed voting contract. Validated on connect, not here.
    pub contract_address: &'static str,
    pub log_filter: &'static str,
    pub receipt_poll_interval_ms: u32,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            contract_address: match option_env!("VOTING_CONTRACT_ADDRESS") {
                Some(address) => address,
                None => DEFAULT_CONTRACT_ADDRESS,
            },
            log_filter: "info,voting_frontend=debug",
            receipt_poll_interval_ms: 1_500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

pub const CONFIG: Config = Config::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_address_is_well_formed() {
        let address = shared::parse_address(DEFAULT_CONTRACT_ADDRESS).unwrap();
        assert_eq!(shared::checksum(&address), DEFAULT_CONTRACT_ADDRESS);
        assert!(Config::default().receipt_poll_interval_ms > 0);
    }
}
