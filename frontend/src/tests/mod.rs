
mod voting_tests;

use std::rc::Rc;

use mock_wallet::{MockWallet, CONTRACT};

use crate::app::VotingApp;

fn app_for(wallet: &Rc<MockWallet>) -> VotingApp<MockWallet> {
    VotingApp::new(wallet.clone(), CONTRACT)
}
