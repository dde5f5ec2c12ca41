use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let state = mock_pod::PodState::shared();
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    println!("mock pod listening on {}", listener.local_addr()?);
    mock_pod::run(listener, state).await
}
