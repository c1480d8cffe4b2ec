pub mod reqwest_endpoint_client;
