//! Test suites exercising a client against a fake master.

mod dispatch_behaviour;
mod support;
