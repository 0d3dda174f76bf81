mod client;
mod helpers;
mod reconnect;
