mod fixture;
mod invariants;
mod single_provider;
