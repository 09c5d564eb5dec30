/// A self-contained HTML page that shows the overlay image between a title
/// header and a usage footer, and prints itself once loaded.
pub fn print_document(title: &str, image_data_url: &str) -> String {
    let title = escape_html(title);
    let src = escape_html(image_data_url);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <style>
      @media print {{
        body {{ margin: 0; padding: 0; }}
        img {{ max-width: 100%; height: auto; display: block; margin: 0 auto; page-break-inside: avoid; }}
        @page {{ size: auto; margin: 0.5cm; }}
      }}
      body {{ font-family: Arial, sans-serif; background: white; color: black; }}
      .print-header {{ text-align: center; margin-bottom: 10px; font-size: 14px; }}
      .print-footer {{ text-align: center; margin-top: 15px; font-size: 12px; color: #555; }}
    </style>
  </head>
  <body>
    <div class="print-header">
      <h2>{title}</h2>
      <p>Printed from Grid Expand - Grid Drawing Assistant</p>
    </div>
    <img src="{src}" alt="Grid Drawing" />
    <div class="print-footer">
      <p>Use this grid as a reference for your drawing. Each square is labeled to help you track your progress.</p>
    </div>
    <script>
      window.onload = function() {{
        setTimeout(function() {{
          window.print();
          setTimeout(function() {{ window.close(); }}, 100);
        }}, 500);
      }};
    </script>
  </body>
</html>
"#
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_title_and_image() {
        let html = print_document("Fox - Grid Drawing", "data:image/png;base64,AAEC");
        assert!(html.contains("<title>Fox - Grid Drawing</title>"));
        assert!(html.contains("<h2>Fox - Grid Drawing</h2>"));
        assert!(html.contains(r#"<img src="data:image/png;base64,AAEC""#));
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn title_is_escaped() {
        let html = print_document("<b>\"x\" & y</b>", "data:,");
        assert!(html.contains("&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }
}
