mod callbacks;
mod client;
mod connection_state;
mod correlation;
mod dispatcher;
