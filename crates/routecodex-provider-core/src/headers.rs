pub type Headers = Vec<(String, String)>;
