//! Static pages the wallet lands on.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Rolegate</title>
</head>
<body>
  <h1>Rolegate</h1>
  <p>Log in with your Idena identity from Discord with <code>/login</code>.</p>
</body>
</html>
"#;

pub const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Rolegate - logged in</title>
</head>
<body>
  <h1>You are logged in</h1>
  <p>Your roles will be updated shortly. You can close this page and return to Discord.</p>
</body>
</html>
"#;
