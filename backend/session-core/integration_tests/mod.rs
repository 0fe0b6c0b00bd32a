mod controller;
mod support;
mod transport;
