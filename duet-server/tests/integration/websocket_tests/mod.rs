mod test_health_endpoint;
