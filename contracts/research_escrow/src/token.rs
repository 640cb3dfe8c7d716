use soroban_sdk::{token, Address, Env};

/// Moves `amount` of `token` between two addresses. The sender's auth is
/// checked by the token contract; the contract itself authorises outflows
/// from its own address implicitly.
pub fn transfer(env: &Env, token: &Address, from: &Address, to: &Address, amount: &i128) {
    token::Client::new(env, token).transfer(from, to, amount);
}
