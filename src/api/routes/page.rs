//! Dashboard Page
//!
//! - GET / - The live chart page
//!
//! The page is static. It opens the WebSocket, replaces the contents of
//! its `.canvas` container with every `frame` it receives, and turns
//! button presses into `add` / `remove` messages.

use axum::response::Html;

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Weatherboard</title>
<style>
  body { font-family: sans-serif; margin: 2rem; }
  .controls { margin-bottom: 1rem; }
  .error { color: firebrick; min-height: 1.2em; }
</style>
</head>
<body>
<div class="controls">
  <button id="add">add</button>
  <button id="remove">remove</button>
</div>
<div id="error" class="error"></div>
<div class="canvas"></div>
<script>
(function () {
  var scheme = location.protocol === "https:" ? "wss://" : "ws://";
  var ws = new WebSocket(scheme + location.host + "/api/v1/ws");
  var canvas = document.querySelector(".canvas");
  var error = document.getElementById("error");

  ws.onmessage = function (event) {
    var msg = JSON.parse(event.data);
    if (msg.type === "frame") {
      canvas.innerHTML = msg.svg;
    } else if (msg.type === "error") {
      error.textContent = msg.message;
    } else if (msg.type === "appended") {
      error.textContent = "";
    }
  };
  ws.onclose = function () {
    error.textContent = "Disconnected";
  };

  function send(type) {
    if (ws.readyState === WebSocket.OPEN) {
      ws.send(JSON.stringify({ type: type }));
    }
  }
  document.getElementById("add").addEventListener("click", function () { send("add"); });
  document.getElementById("remove").addEventListener("click", function () { send("remove"); });
})();
</script>
</body>
</html>
"#;

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_page_has_controls() {
        let Html(page) = index().await;
        assert!(page.contains(r#"id="add""#));
        assert!(page.contains(r#"id="remove""#));
        assert!(page.contains(r#"class="canvas""#));
        assert!(page.contains("/api/v1/ws"));
    }
}
