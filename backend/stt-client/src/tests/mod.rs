mod ipc;
mod protocol;
