use futures::executor::block_on;
use futures::join;
use shared::{ErrorCode, VotingView, WinnerInfo};

use super::app_for;
use super::mock_wallet::{addr, Hold, MockWallet, ADMIN, OUTSIDER, VOTER};
use crate::provider::WalletEvent;
use crate::voting::VotingSession;

#[test]
fn refresh_loads_candidates_and_winner() {
    let wallet = MockWallet::new(VOTER).with_candidates(&[("Alice", 3), ("Bob", 5)]);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let view = app.voting_view();
    assert_eq!(view.candidates.len(), 2);
    assert_eq!(view.winner, Some(WinnerInfo { name: "Bob".into(), votes: 5 }));
    assert!(!view.loading);
    assert_eq!(view.error, None);

    let results = app.results();
    assert_eq!(results.total_votes, 8);
    assert_eq!(results.percentage_of(0), Some(38));
    assert_eq!(results.percentage_of(1), Some(62));
}

#[test]
fn refresh_is_idempotent() {
    let wallet = MockWallet::new(VOTER).with_candidates(&[("Alice", 1), ("Bob", 0)]);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let first = app.voting().state();
    block_on(app.refresh_all());
    assert_eq!(app.voting().state(), first);
}

#[test]
fn missing_winner_is_not_an_error() {
    let wallet = MockWallet::new(VOTER).with_candidates(&[("Alice", 0)]);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let view = app.voting_view();
    assert_eq!(view.winner, None);
    assert_eq!(view.error, None);

    wallet.fail_winner_transport(true);
    block_on(app.refresh_all());
    assert_eq!(app.voting_view().error, None);
}

#[test]
fn failed_candidate_read_keeps_the_stale_list() {
    let wallet = MockWallet::new(VOTER).with_candidates(&[("Alice", 2)]);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    wallet.fail_candidate_reads(true);
    block_on(app.refresh_all());

    let view = app.voting_view();
    assert_eq!(view.candidates.len(), 1);
    assert_eq!(view.error.as_deref(), Some("Failed to read getCandidates()"));
    assert!(!view.loading);
}

#[test]
fn admin_adds_candidate() {
    let wallet = MockWallet::new(ADMIN);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    block_on(app.add_candidate("  Carol ")).unwrap();
    let view = app.voting_view();
    assert_eq!(view.candidates.len(), 1);
    assert_eq!(view.candidates[0].name, "Carol");
    assert_eq!(view.candidates[0].vote_count, 0);
    assert!(!view.loading);
}

#[test]
fn long_candidate_names_are_left_to_the_contract() {
    let wallet = MockWallet::new(ADMIN);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let name = "Candidate ".repeat(20);
    block_on(app.add_candidate(&name)).unwrap();
    assert_eq!(app.voting_view().candidates[0].name, name.trim());
}

#[test]
fn write_failing_after_an_account_switch_leaves_the_new_session_clean() {
    let wallet = MockWallet::new(ADMIN).with_candidates(&[("Alice", 0)]);
    wallet.revert_on_mine(true);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let release = wallet.hold(Hold::Receipt);
    let (written, switched) = block_on(async {
        join!(app.add_candidate("Carol"), async {
            let switched = app.handle_event(WalletEvent::AccountsChanged(vec![addr(VOTER)])).await;
            release.send(()).unwrap();
            switched
        })
    });

    assert!(switched.is_ok());
    assert_eq!(written.unwrap_err().message, "Transaction reverted");

    let view = app.voting_view();
    assert_eq!(view.error, None);
    assert!(!view.loading);
    assert_eq!(view.candidates.len(), 1);
    assert_eq!(app.wallet().gateway().unwrap().signer(), addr(VOTER));
}

#[test]
fn blank_candidate_name_never_reaches_the_wallet() {
    let wallet = MockWallet::new(ADMIN);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let err = block_on(app.add_candidate("   ")).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(wallet.submitted(), 0);
    assert_eq!(app.voting_view().error, Some(err.message));
}

#[test]
fn non_admin_write_surfaces_the_revert_reason() {
    let wallet = MockWallet::new(VOTER);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let err = block_on(app.add_candidate("Mallory")).unwrap_err();
    assert_eq!(err.code, ErrorCode::Transaction);
    assert_eq!(err.message, "Only admin can perform this action");

    let view = app.voting_view();
    assert_eq!(view.error.as_deref(), Some("Only admin can perform this action"));
    assert!(!view.loading);
    assert!(view.candidates.is_empty());
}

#[test]
fn vote_counts_exactly_once() {
    let wallet = MockWallet::new(VOTER).with_candidates(&[("Alice", 0), ("Bob", 4)]);
    wallet.authorize(VOTER);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    block_on(app.vote(0)).unwrap();
    let view = app.voting_view();
    assert_eq!(view.candidates[0].vote_count, 1);
    assert_eq!(view.candidates[1].vote_count, 4);

    let eligibility = app.wallet_view().eligibility;
    assert!(eligibility.has_voted);
    assert_eq!(eligibility.vote_index, 0);
    assert!(!eligibility.can_vote());

    let err = block_on(app.vote(1)).unwrap_err();
    assert_eq!(err.message, "You have already voted");
    assert_eq!(app.voting_view().candidates[1].vote_count, 4);
}

#[test]
fn unauthorized_vote_is_rejected() {
    let wallet = MockWallet::new(OUTSIDER).with_candidates(&[("Alice", 0)]);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let err = block_on(app.vote(0)).unwrap_err();
    assert_eq!(err.message, "You are not allowed to vote");
    assert_eq!(app.voting_view().candidates[0].vote_count, 0);
}

#[test]
fn reverted_receipt_is_reported() {
    let wallet = MockWallet::new(VOTER).with_candidates(&[("Alice", 0)]);
    wallet.authorize(VOTER);
    wallet.revert_on_mine(true);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let err = block_on(app.vote(0)).unwrap_err();
    assert_eq!(err.code, ErrorCode::Transaction);
    assert_eq!(app.voting_view().error.as_deref(), Some("Transaction reverted"));
}

#[test]
fn allowing_yourself_refreshes_eligibility() {
    let wallet = MockWallet::new(ADMIN);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();
    assert!(!app.wallet_view().eligibility.is_allowed);

    block_on(app.allow_voter(VOTER)).unwrap();
    assert!(!app.wallet_view().eligibility.is_allowed);

    block_on(app.allow_voter(&ADMIN.to_lowercase())).unwrap();
    assert!(app.wallet_view().eligibility.is_allowed);
    assert!(!app.voting_view().loading);
}

#[test]
fn malformed_voter_address_is_invalid_input() {
    let wallet = MockWallet::new(ADMIN);
    let app = app_for(&wallet);
    block_on(app.connect()).unwrap();

    let err = block_on(app.allow_voter("0x1234")).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(wallet.submitted(), 0);
}

#[test]
fn writes_need_a_connection() {
    let voting = VotingSession::<MockWallet>::new();

    let err = block_on(voting.vote(0)).unwrap_err();
    assert_eq!(err.code, ErrorCode::NotConnected);
    assert_eq!(voting.state().error.as_deref(), Some("Connect a wallet first"));

    let err = block_on(voting.add_candidate("Carol")).unwrap_err();
    assert_eq!(err.code, ErrorCode::NotConnected);
    assert!(!voting.state().loading);
}

#[test]
fn unbound_refresh_does_nothing() {
    let voting = VotingSession::<MockWallet>::new();
    block_on(voting.refresh());
    assert_eq!(voting.view(), VotingView::default());
}
