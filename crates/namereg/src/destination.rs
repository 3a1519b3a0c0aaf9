//! Destination scripts for name outputs.
//!
//! A destination is either an address the caller supplied or a key reserved
//! from the wallet's keypool. A reservation is only kept once the transaction
//! that pays to it has been broadcast or queued: call
//! [`DestinationResolver::commit`] then. Dropping the resolver without
//! committing hands the key back to the keypool.

use namereg_core::{Reservation, Script, Wallet, WalletError};

pub struct DestinationResolver<'w, W: Wallet + ?Sized> {
    wallet: &'w W,
    fixed: Option<Script>,
    reservation: Option<Reservation>,
}

impl<'w, W: Wallet + ?Sized> DestinationResolver<'w, W> {
    /// Decode `dest_address` if given. Nothing is reserved yet.
    pub fn new(wallet: &'w W, dest_address: Option<&str>) -> Result<Self, WalletError> {
        let fixed = dest_address
            .map(|address| wallet.decode_address(address))
            .transpose()?;
        Ok(Self {
            wallet,
            fixed,
            reservation: None,
        })
    }

    /// The destination script, reserving a keypool key on first use.
    pub fn script(&mut self) -> Result<Script, WalletError> {
        if let Some(script) = &self.fixed {
            return Ok(script.clone());
        }
        if let Some(reservation) = &self.reservation {
            return Ok(reservation.script.clone());
        }
        let reservation = self.wallet.reserve_destination()?;
        let script = reservation.script.clone();
        self.reservation = Some(reservation);
        Ok(script)
    }

    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    /// Keep the reserved key, if any.
    pub fn commit(mut self) {
        if let Some(reservation) = self.reservation.take() {
            self.wallet.keep_destination(reservation.id);
        }
    }
}

impl<W: Wallet + ?Sized> Drop for DestinationResolver<'_, W> {
    fn drop(&mut self) {
        if let Some(reservation) = self.reservation.take() {
            self.wallet.return_destination(reservation.id);
        }
    }
}
