mod events;
mod framer;
mod message;
