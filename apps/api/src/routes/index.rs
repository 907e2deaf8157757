use axum::response::Html;

/// GET /
/// Minimal upload page driving /upload then /generate.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PortfolioGen</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
</head>
<body class="bg-light">
    <main class="container py-5" style="max-width: 640px;">
        <h1 class="mb-3">PortfolioGen</h1>
        <p class="text-muted">Upload a PDF resume and get a portfolio website back.</p>
        <form id="upload-form" class="card card-body">
            <input class="form-control mb-3" type="file" name="file" accept=".pdf" required>
            <button class="btn btn-primary" type="submit">Generate portfolio</button>
        </form>
        <p id="status" class="mt-3"></p>
    </main>
    <script>
        const form = document.getElementById('upload-form');
        const status = document.getElementById('status');
        form.addEventListener('submit', async (event) => {
            event.preventDefault();
            const fail = (body) => { status.textContent = (body.error && body.error.message) || 'Something went wrong'; };
            status.textContent = 'Uploading...';
            const upload = await fetch('/upload', { method: 'POST', body: new FormData(form) });
            const uploaded = await upload.json();
            if (!upload.ok) return fail(uploaded);
            status.textContent = 'Generating, this can take a minute...';
            const generate = await fetch('/generate', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ job_id: uploaded.job_id }),
            });
            const generated = await generate.json();
            if (!generate.ok) return fail(generated);
            window.location.href = generated.view_url;
        });
    </script>
</body>
</html>"#;
