pub mod server;

#[derive(Debug)]
pub enum Action {
    Server(Box<server::Args>),
}
